//! Host configuration read from the environment.

#[cfg(test)]
mod tests {
    use lambda_events_core::LambdaEventsConfig;

    use crate::filter_directive;

    fn config_with_level(level: &str) -> LambdaEventsConfig {
        LambdaEventsConfig::from_lookup(|key| (key == "LOG_LEVEL").then(|| level.to_owned()))
    }

    #[test]
    fn test_should_filter_with_log_level_when_rust_log_unset() {
        let config = config_with_level("debug");
        assert_eq!(filter_directive(None, &config), "debug");
        assert_eq!(filter_directive(Some("  ".to_owned()), &config), "debug");
    }

    #[test]
    fn test_should_prefer_rust_log_over_log_level() {
        let config = config_with_level("debug");
        assert_eq!(
            filter_directive(Some("lambda_events_restapi=trace".to_owned()), &config),
            "lambda_events_restapi=trace"
        );
    }

    #[test]
    fn test_should_default_to_info_filter() {
        let config = LambdaEventsConfig::from_lookup(|_| None);
        assert_eq!(filter_directive(None, &config), "info");
    }
}
