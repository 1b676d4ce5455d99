// Trellis - A decorator-style HTTP application core for Rust
//
// Controllers declare routes through decorators that write metadata, an
// injector builds the controller graph, and the router matches requests and
// composes responses.

// Re-export core functionality
pub use trellis_core::*;

// Re-export optional crates
#[cfg(feature = "config")]
pub use trellis_config;

// Prelude for common imports
pub mod prelude {
    pub use trellis_core::prelude::*;

    #[cfg(feature = "config")]
    pub use trellis_config::{ConfigManager, Validate};
}
