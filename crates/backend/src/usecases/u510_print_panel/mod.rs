pub mod panel;
pub mod preview;
pub mod sorting;
pub mod state;

pub use panel::{PanelError, PanelOptions, PrintPanel};
pub use preview::{LoggingPreviewRenderer, PreviewError, PreviewRenderer};
