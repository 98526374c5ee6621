#![allow(clippy::needless_doctest_main)]
#![warn(
    missing_debug_implementations,
    missing_docs,
    rust_2018_idioms,
    unreachable_pub
)]
#![doc(test(
    no_crate_inject,
    attr(deny(warnings, rust_2018_idioms), allow(dead_code, unused_variables))
))]

//! Entry point and test macros for coloop.

mod entry;
mod parse;

/// Runs an async function as the root task of a fresh `coloop::Loop`.
///
/// The function keeps its signature minus `async`. Its body is moved into the
/// root task, driven with `Loop::block_on`, and a panic of the root task is
/// resumed in the caller.
///
/// # Options
///
/// - `ready_order = "lifo" | "fifo"`: where woken frames are queued. `lifo`
///   is the default.
/// - `name = "..."`: name of the loop, recorded on its tracing span.
///
/// Function arguments are NOT allowed on `main`.
///
/// # Usage
///
/// ```rust
/// #[coloop::main]
/// async fn main() {
///     println!("Hello world");
/// }
/// ```
///
/// Equivalent code not using `#[coloop::main]`
///
/// ```rust
/// fn main() {
///     coloop::runtime::Builder::new()
///         .build()
///         .block_on(async move {
///             println!("Hello world");
///         })
/// }
/// ```
///
/// ## Queue woken frames in FIFO order
///
/// ```rust
/// #[coloop::main(ready_order = "fifo", name = "app")]
/// async fn main() {
///     println!("Hello world");
/// }
/// ```
///
/// Equivalent code not using `#[coloop::main]`
///
/// ```rust
/// fn main() {
///     coloop::runtime::Builder::new()
///         .ready_order(coloop::runtime::AddMode::Fifo)
///         .name("app")
///         .build()
///         .block_on(async move {
///             println!("Hello world");
///         })
/// }
/// ```
#[proc_macro_attribute]
pub fn main(
    args: proc_macro::TokenStream,
    item: proc_macro::TokenStream,
) -> proc_macro::TokenStream {
    entry::main(args.into(), item.into()).into()
}

/// Runs an async test on its own `coloop::Loop`.
///
/// Accepts the same options as [`macro@main`]. Every test gets a fresh loop.
///
/// ```no_run
/// #[coloop::test]
/// async fn my_test() {
///     assert!(true);
/// }
/// ```
///
/// Equivalent code not using `#[coloop::test]`
///
/// ```no_run
/// #[test]
/// fn my_test() {
///     coloop::runtime::Builder::new()
///         .build()
///         .block_on(async move {
///             assert!(true);
///         })
/// }
/// ```
#[proc_macro_attribute]
pub fn test(
    args: proc_macro::TokenStream,
    item: proc_macro::TokenStream,
) -> proc_macro::TokenStream {
    entry::test(args.into(), item.into()).into()
}
