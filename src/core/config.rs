mod parsing;
mod settings;
mod types;

pub(crate) use types::Settings;

#[cfg(test)]
mod tests {
    use super::Settings;
    use crate::test_support;

    #[tokio::test]
    async fn defaults_when_env_is_empty() {
        let _guard = test_support::env_lock().await;
        test_support::clear_config_env();

        let settings = Settings::load().expect("settings");
        assert_eq!(settings.server_addr(), "0.0.0.0:3000");
        assert_eq!(settings.backend().base_url, "http://localhost:5000");
        assert_eq!(settings.backend().base_path, "");
        assert_eq!(settings.backend().evaluation_timeout.as_secs(), 300);
        assert_eq!(settings.backend().request_timeout, None);
        assert!(!settings.telemetry().prometheus_enabled);
    }

    #[tokio::test]
    async fn forwarded_call_timeout_is_opt_in() {
        let _guard = test_support::env_lock().await;
        test_support::clear_config_env();
        std::env::set_var("BACKEND_TIMEOUT_SECONDS", "45");

        let settings = Settings::load().expect("settings");
        assert_eq!(settings.backend().request_timeout, Some(std::time::Duration::from_secs(45)));

        std::env::set_var("BACKEND_TIMEOUT_SECONDS", "0");
        assert!(Settings::load().is_err());
        test_support::clear_config_env();
    }

    #[tokio::test]
    async fn full_backend_url_wins_over_host_and_port() {
        let _guard = test_support::env_lock().await;
        test_support::clear_config_env();
        std::env::set_var("BACKEND_URL", "http://grader.internal:8008/");
        std::env::set_var("BACKEND_HOST", "ignored");
        std::env::set_var("BACKEND_PORT", "9999");

        let settings = Settings::load().expect("settings");
        assert_eq!(settings.backend().base_url, "http://grader.internal:8008");
        test_support::clear_config_env();
    }

    #[tokio::test]
    async fn host_and_port_build_backend_url() {
        let _guard = test_support::env_lock().await;
        test_support::clear_config_env();
        std::env::set_var("BACKEND_HOST", "10.0.0.7");
        std::env::set_var("BACKEND_PORT", "8008");

        let settings = Settings::load().expect("settings");
        assert_eq!(settings.backend().base_url, "http://10.0.0.7:8008");
        test_support::clear_config_env();
    }

    #[tokio::test]
    async fn base_path_is_normalized() {
        let _guard = test_support::env_lock().await;
        test_support::clear_config_env();
        std::env::set_var("NEXT_PUBLIC_BASE_PATH", "iview3/");

        let settings = Settings::load().expect("settings");
        assert_eq!(settings.backend().base_path, "/iview3");
        test_support::clear_config_env();
    }

    #[tokio::test]
    async fn rejects_invalid_backend_url() {
        let _guard = test_support::env_lock().await;
        test_support::clear_config_env();
        std::env::set_var("BACKEND_URL", "grader.internal");

        assert!(Settings::load().is_err());
        test_support::clear_config_env();
    }
}
