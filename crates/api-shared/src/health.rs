use crate::dto::HealthRes;

/// Health service shared by the REST binaries.
#[derive(Clone, Default)]
pub struct HealthService;

impl HealthService {
    pub fn new() -> Self {
        Self
    }

    /// Static health check; no state to inspect.
    pub fn check_health() -> HealthRes {
        HealthRes {
            ok: true,
            message: "CMR is alive".into(),
        }
    }
}
