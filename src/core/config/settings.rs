use std::time::Duration;

use super::parsing::{
    env_optional, env_or_default, parse_base_path, parse_bool, parse_cors_origins,
    parse_environment, parse_u64, resolve_backend_url,
};
use super::types::{
    BackendSettings, ConfigError, CorsSettings, RuntimeSettings, ServerHost, ServerPort,
    ServerSettings, Settings, TelemetrySettings,
};

impl Settings {
    pub(crate) fn load() -> Result<Self, ConfigError> {
        let host = env_or_default("IVIEW_HOST", "0.0.0.0");
        let port = env_optional("IVIEW_PORT").or_else(|| env_optional("PORT"));
        let port = port.unwrap_or_else(|| "3000".to_string());

        let environment =
            parse_environment(env_optional("IVIEW_ENV").or_else(|| env_optional("NODE_ENV")));

        let base_url = resolve_backend_url(
            env_optional("BACKEND_URL").or_else(|| env_optional("NEXT_PUBLIC_API_URL")),
            env_optional("BACKEND_HOST"),
            env_optional("BACKEND_PORT"),
        )?;
        let base_path =
            parse_base_path(env_optional("BASE_PATH").or_else(|| env_optional("NEXT_PUBLIC_BASE_PATH")));

        let request_timeout = env_optional("BACKEND_TIMEOUT_SECONDS")
            .map(|value| parse_u64("BACKEND_TIMEOUT_SECONDS", value))
            .transpose()?;
        let connect_timeout = parse_u64(
            "BACKEND_CONNECT_TIMEOUT_SECONDS",
            env_or_default("BACKEND_CONNECT_TIMEOUT_SECONDS", "10"),
        )?;
        let evaluation_timeout = parse_u64(
            "EVALUATION_TIMEOUT_SECONDS",
            env_or_default("EVALUATION_TIMEOUT_SECONDS", "300"),
        )?;

        let cors_origins = parse_cors_origins(env_optional("BACKEND_CORS_ORIGINS"))?;

        let log_level = env_or_default("LOG_LEVEL", "info");
        let json = env_optional("LOG_JSON").map(|value| parse_bool(&value)).unwrap_or(false);
        let prometheus_enabled =
            env_optional("PROMETHEUS_ENABLED").map(|value| parse_bool(&value)).unwrap_or(false);

        let settings = Self {
            server: ServerSettings { host: ServerHost::parse(host)?, port: ServerPort::parse(port)? },
            runtime: RuntimeSettings { environment },
            backend: BackendSettings {
                base_url,
                base_path,
                request_timeout: request_timeout.map(Duration::from_secs),
                connect_timeout: Duration::from_secs(connect_timeout),
                evaluation_timeout: Duration::from_secs(evaluation_timeout),
            },
            cors: CorsSettings { origins: cors_origins },
            telemetry: TelemetrySettings { log_level, json, prometheus_enabled },
        };

        settings.validate()?;
        Ok(settings)
    }

    pub(crate) fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host.0, self.server.port.0)
    }

    pub(crate) fn server_host(&self) -> &str {
        &self.server.host.0
    }

    pub(crate) fn server_port(&self) -> u16 {
        self.server.port.0
    }

    pub(crate) fn backend(&self) -> &BackendSettings {
        &self.backend
    }

    pub(crate) fn cors(&self) -> &CorsSettings {
        &self.cors
    }

    pub(crate) fn telemetry(&self) -> &TelemetrySettings {
        &self.telemetry
    }

    pub(crate) fn runtime(&self) -> &RuntimeSettings {
        &self.runtime
    }

    fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("BACKEND_TIMEOUT_SECONDS", self.backend.request_timeout),
            ("BACKEND_CONNECT_TIMEOUT_SECONDS", Some(self.backend.connect_timeout)),
            ("EVALUATION_TIMEOUT_SECONDS", Some(self.backend.evaluation_timeout)),
        ] {
            if value.is_some_and(|value| value.is_zero()) {
                return Err(ConfigError::InvalidValue { field, value: "0".to_string() });
            }
        }

        Ok(())
    }
}
