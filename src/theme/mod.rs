pub mod renderer;

pub use renderer::WidgetRenderer;
