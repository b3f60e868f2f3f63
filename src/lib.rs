//! Runs a YAML-defined chain of steps, piping each step's outputs into the next.

pub mod cli;
pub mod config;
pub mod context;
pub mod env;
pub mod framework;
pub mod github;
pub mod runner;
pub mod shutdown;
pub mod steps;
pub mod template;
pub mod transactions;

#[cfg(test)]
mod test_utils;

/// The `User-Agent` sent with every request.
pub const USER_AGENT: &str = "workflows/1.0";

/// A shorthand to define a statically allocated variable using a [`std::sync::LazyLock`].
///
/// # Examples
///
/// ```rust
/// # use workflows::static_lazy_lock;
/// # use std::sync::LazyLock;
/// static_lazy_lock!{
///     pub VAR_1: String = String::from("a static variable");
/// }
/// // ...equals to...
/// pub static VAR_2: LazyLock<String> = LazyLock::new(|| String::from("a static variable"));
/// ```
#[macro_export]
macro_rules! static_lazy_lock {
    ($(#[$meta:meta])* $vis:vis $name:ident: $type:ty = $expr:expr $(;)?) => {
        $(#[$meta])*
        $vis static $name: $crate::__priv_macro_use::LazyLock<$type> =
            $crate::__priv_macro_use::LazyLock::new(|| $expr);
    };
}

#[doc(hidden)]
pub mod __priv_macro_use {
    pub use std::sync::LazyLock;
}
