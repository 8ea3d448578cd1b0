mod utils;
#[allow(unused)]
use utils::*;

#[cfg(feature = "integration")]
mod tests {
    use super::*;
    use buddyload::prelude::*;
    use mock_service::MockConfig;
    use sciencebuddy::driver::{CHAT_CHECK, SUMMARY_CHECK};
    use std::time::Duration;

    #[tokio::test]
    async fn default_profile_against_mock() {
        init();
        let (service, driver) = mock_target(MockConfig {
            delay: Duration::from_millis(20),
            ..MockConfig::default()
        })
        .await;

        let stats = driver.scenario().await;
        println!("{stats}");

        assert_eq!(stats.vus_max, 30);
        assert!(stats.elapsed >= Duration::from_secs(180));
        assert!(stats.elapsed < Duration::from_secs(215));
        assert_eq!(stats.check_fails(), 0);

        // A VU iteration takes about 2 s on average, and VUs join over 30 s.
        assert!(stats.iterations > 2_000, "iterations={}", stats.iterations);
        assert!(stats.iterations < 2_800, "iterations={}", stats.iterations);
        assert_eq!(
            stats.check(SUMMARY_CHECK).unwrap().total(),
            service.summary_requests().len() as u64
        );
        assert!(stats.check(CHAT_CHECK).unwrap().passes >= stats.iterations);
    }
}
