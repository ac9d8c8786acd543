use proc_macro::TokenStream;

mod module;

/// Attribute macro for declaring a host module and its static metadata
///
/// Generates the `ModuleDefinition` implementation for the annotated struct.
/// The struct must implement `Default` and `modhost::Module`.
///
/// # Example
/// ```ignore
/// use modhost::{module, Module};
///
/// #[module(
///     dependencies = [DatabaseModule, CacheModule],
///     name = "Orders",
///     description = "Order processing",
///     priority = 10,
/// )]
/// #[derive(Default)]
/// pub struct OrdersModule;
///
/// impl Module for OrdersModule {}
/// ```
///
/// Supported arguments:
/// - `dependencies = [Path, ...]`: modules that must be configured and initialized first
/// - `name = "..."`, `description = "..."`: display metadata
/// - `priority = <i32 expr>`: higher values are ordered earlier among independent modules
/// - `load_on_demand` or `load_on_demand = <bool>`: excluded from bulk discovery
#[proc_macro_attribute]
pub fn module(attr: TokenStream, item: TokenStream) -> TokenStream {
    module::module_attribute(attr, item)
}
