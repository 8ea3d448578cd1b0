use buddyload::Pause;
use mock_service::{MockConfig, MockService};
use sciencebuddy::{ScienceBuddy, TargetConfig};
use std::sync::OnceLock;
use tracing::error;
use tracing_subscriber::FmtSubscriber;

#[allow(unused)]
pub fn init() {
    static ONCE_LOCK: OnceLock<()> = OnceLock::new();

    ONCE_LOCK.get_or_init(|| {
        let default_panic = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            default_panic(info);
            error!("Panic occurred: {info:?}");
            std::process::exit(1);
        }));

        // Another test harness may have installed a subscriber already.
        let _ = FmtSubscriber::builder()
            .with_env_filter("buddyload=debug,sciencebuddy=debug,mock_service=info")
            .try_init();
    });
}

/// A mock service plus a driver pointed at it.
#[allow(unused)]
pub async fn mock_target(config: MockConfig) -> (MockService, ScienceBuddy) {
    let service = mock_service::spawn(config).await.unwrap();
    let target = TargetConfig::new(&service.url()).unwrap();
    (service, ScienceBuddy::new(&target))
}

/// Short think times so a few seconds are enough for many iterations.
#[allow(unused)]
pub const SHORT_PAUSE: Pause = Pause::fixed(std::time::Duration::from_millis(50));
