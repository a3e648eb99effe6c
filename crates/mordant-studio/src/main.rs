use mordant_engine::core::{FrameScheduler, SchedulerConfig};
use mordant_engine::device::GpuInit;
use mordant_engine::logging::{init_logging, LoggingConfig};
use mordant_engine::window::{Runtime, RuntimeConfig};

fn main() {
    init_logging(LoggingConfig::default());

    let runtime = RuntimeConfig {
        title: "mordant".to_string(),
        ..Default::default()
    };
    let scheduler = FrameScheduler::new(SchedulerConfig::default());

    if let Err(err) = Runtime::run(runtime, GpuInit::default(), scheduler) {
        log::error!("fatal: {err:#}");

        eprintln!();
        eprintln!("  ╔════════════════════════════════════════════════╗");
        eprintln!("  ║  mordant could not run on this machine.        ║");
        eprintln!("  ║  A GPU with Vulkan, Metal or DX12 is required. ║");
        eprintln!("  ╚════════════════════════════════════════════════╝");
        eprintln!();
        eprintln!("  {err:#}");
        eprintln!();

        std::process::exit(1);
    }
}
