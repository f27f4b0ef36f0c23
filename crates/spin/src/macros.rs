/// Declare a trait that spin proxies can implement
///
/// The trait gets [`Target`](crate::Target) as a supertrait, `dyn Trait`
/// gets an [`Interface`](crate::Interface) implementation, and
/// [`Proxy<dyn Trait>`](crate::Proxy) gets a forwarding implementation that
/// routes every call through its spin.
///
/// Methods take `&self` and owned arguments. Mark a parameter with
/// `#[listener]` to let interceptors such as
/// [`ListenerOver`](crate::ListenerOver) replace it with a proxy; its type
/// must be `Arc<dyn SomeInterface>`.
///
/// ```
/// use std::sync::Arc;
///
/// spin::interface! {
///     pub trait ChangeListener {
///         fn changed(&self, value: u32);
///     }
/// }
///
/// spin::interface! {
///     pub trait Bean {
///         fn value(&self) -> u32;
///         fn add_change_listener(&self, listener: #[listener] Arc<dyn ChangeListener>);
///     }
/// }
/// ```
#[macro_export]
macro_rules! interface {
    (
        $(#[$meta:meta])*
        $vis:vis trait $name:ident {
            $(
                $(#[$method_meta:meta])*
                fn $method:ident(&self $(, $arg:ident : $(#[$mark:ident])? $ty:ty)*) $(-> $ret:ty)?;
            )*
        }
    ) => {
        $(#[$meta])*
        $vis trait $name: $crate::Target {
            $(
                $(#[$method_meta])*
                fn $method(&self $(, $arg: $ty)*) $(-> $ret)?;
            )*
        }

        impl $crate::Interface for dyn $name {
            fn wrap(proxy: $crate::Proxy<Self>) -> ::std::sync::Arc<Self> {
                ::std::sync::Arc::new(proxy)
            }
        }

        impl $name for $crate::Proxy<dyn $name> {
            $(
                fn $method(&self $(, $arg: $ty)*) $(-> $ret)? {
                    static METHOD: $crate::Method = $crate::Method {
                        interface: ::core::stringify!($name),
                        name: ::core::stringify!($method),
                        params: &[$(
                            $crate::Param {
                                name: ::core::stringify!($arg),
                                kind: $crate::__param_kind!($($mark)? $ty),
                            }
                        ),*],
                        returns: $crate::__returns!($($ret)?),
                    };

                    self.invoke(
                        &METHOD,
                        ::std::vec![$(::std::boxed::Box::new($arg) as $crate::Value),*],
                        |target, _arguments| target.$method($(_arguments.take::<$ty>()),*),
                    )
                }
            )*
        }
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __param_kind {
    (listener $ty:ty) => {
        $crate::ParamKind::Listener($crate::rewrap::<$ty>)
    };
    ($ty:ty) => {
        $crate::ParamKind::Value
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __returns {
    () => {
        $crate::Returns::Unit
    };
    ($ret:ty) => {
        $crate::Returns::Value
    };
}
