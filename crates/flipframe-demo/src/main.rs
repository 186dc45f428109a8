mod options;
mod view;

use anyhow::Result;

use flipframe_engine::device::PortableBackend;
use flipframe_engine::logging::{LoggingConfig, init_logging};
use flipframe_engine::runtime::Runtime;
use flipframe_ui::EguiApp;
use flipframe_ui::painter::WgpuPainter;

use options::{BackendChoice, DemoOptions};
use view::DemoView;

fn main() {
    init_logging(LoggingConfig::default());

    let options = DemoOptions::from_env();
    log::info!("demo options: {options:?}");

    // startup failures are reported in the log; the exit code stays 0
    if let Err(e) = run(options) {
        log::error!("{e:#}");
    }
}

fn run(options: DemoOptions) -> Result<()> {
    let config = options.runtime_config();
    let clear_color = config.clear_color;

    match options.backend {
        #[cfg(windows)]
        BackendChoice::Dxgi => {
            use flipframe_engine::device::DxgiBackend;
            use flipframe_ui::painter::D3d11Painter;

            Runtime::run(config, move |window| {
                let app = EguiApp::new(D3d11Painter::new(), DemoView::new(clear_color));
                Ok((DxgiBackend::new(window), app))
            })
        }
        _ => Runtime::run(config, move |window| {
            let app = EguiApp::new(WgpuPainter::new(), DemoView::new(clear_color));
            Ok((PortableBackend::new(window), app))
        }),
    }
}
