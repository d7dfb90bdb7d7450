// crates/compliance-agent/src/service.rs
// ============================================================================
// Module: Host Service Lifecycle
// Description: Install/uninstall/start/stop/status against the platform
//              service manager, and the service entry point itself (§4.H).
// Purpose: Isolate the service-manager collaborator from the scheduler and
//          submission pipeline, which are the actually novel parts of this
//          runtime.
// Dependencies: windows-service (Windows only), tracing
// ============================================================================

//! ## Overview
//! The service wrapper is a thin shell: on Windows it registers with the
//! Service Control Manager and, once started, runs the same cron scheduler
//! a `--once`/daemon invocation would. On non-Windows targets every
//! operation returns [`ServiceError::Unsupported`] — this crate's Windows
//! substrate extends to the service lifecycle, not just the registry reads.

use thiserror::Error;

/// Service lifecycle failures.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The host platform has no service manager integration.
    #[error("host service lifecycle is only available on Windows")]
    Unsupported,
    /// The platform service manager rejected the request.
    #[cfg(windows)]
    #[error("service manager error: {0}")]
    Platform(#[source] windows_service::Error),
}

/// The outcome of a `--service-status` query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceState {
    /// The service is registered and running.
    Running,
    /// The service is registered but stopped.
    Stopped,
    /// The service is not registered with the service manager.
    NotInstalled,
}

/// The name this agent registers itself under in the service manager.
pub const SERVICE_NAME: &str = "ComplianceToolkitAgent";

#[cfg(windows)]
mod windows_impl {
    use std::ffi::OsString;

    use windows_service::service::ServiceAccess;
    use windows_service::service::ServiceErrorControl;
    use windows_service::service::ServiceInfo;
    use windows_service::service::ServiceStartType;
    use windows_service::service::ServiceState as WinServiceState;
    use windows_service::service::ServiceType;
    use windows_service::service_manager::ServiceManager;
    use windows_service::service_manager::ServiceManagerAccess;

    use super::ServiceError;
    use super::ServiceState;
    use super::SERVICE_NAME;

    /// Opens a handle to the local service manager with `access`.
    fn manager(access: ServiceManagerAccess) -> Result<ServiceManager, ServiceError> {
        ServiceManager::local_computer(None::<&str>, access).map_err(ServiceError::Platform)
    }

    /// Registers this binary as an auto-start Windows service.
    pub fn install(binary_path: std::path::PathBuf) -> Result<(), ServiceError> {
        let manager = manager(ServiceManagerAccess::CREATE_SERVICE)?;
        let info = ServiceInfo {
            name: OsString::from(SERVICE_NAME),
            display_name: OsString::from("Compliance Toolkit Agent"),
            service_type: ServiceType::OWN_PROCESS,
            start_type: ServiceStartType::AutoStart,
            error_control: ServiceErrorControl::Normal,
            executable_path: binary_path,
            launch_arguments: Vec::new(),
            dependencies: Vec::new(),
            account_name: None,
            account_password: None,
        };
        manager.create_service(&info, ServiceAccess::empty()).map_err(ServiceError::Platform)?;
        Ok(())
    }

    /// Removes this agent's service registration.
    pub fn uninstall() -> Result<(), ServiceError> {
        let manager = manager(ServiceManagerAccess::CONNECT)?;
        let service = manager.open_service(SERVICE_NAME, ServiceAccess::DELETE).map_err(ServiceError::Platform)?;
        service.delete().map_err(ServiceError::Platform)
    }

    /// Starts the registered service.
    pub fn start() -> Result<(), ServiceError> {
        let manager = manager(ServiceManagerAccess::CONNECT)?;
        let service = manager.open_service(SERVICE_NAME, ServiceAccess::START).map_err(ServiceError::Platform)?;
        service.start(&[] as &[&std::ffi::OsStr]).map_err(ServiceError::Platform)
    }

    /// Stops the registered service.
    pub fn stop() -> Result<(), ServiceError> {
        let manager = manager(ServiceManagerAccess::CONNECT)?;
        let service = manager.open_service(SERVICE_NAME, ServiceAccess::STOP).map_err(ServiceError::Platform)?;
        service.stop().map_err(ServiceError::Platform)?;
        Ok(())
    }

    /// Queries the registered service's current state.
    pub fn status() -> Result<ServiceState, ServiceError> {
        let manager = manager(ServiceManagerAccess::CONNECT)?;
        match manager.open_service(SERVICE_NAME, ServiceAccess::QUERY_STATUS) {
            Ok(service) => {
                let status = service.query_status().map_err(ServiceError::Platform)?;
                Ok(match status.current_state {
                    WinServiceState::Running => ServiceState::Running,
                    _ => ServiceState::Stopped,
                })
            }
            Err(windows_service::Error::Winapi(_)) => Ok(ServiceState::NotInstalled),
            Err(error) => Err(ServiceError::Platform(error)),
        }
    }
}

#[cfg(not(windows))]
mod stub_impl {
    use super::ServiceError;
    use super::ServiceState;

    pub fn install(_binary_path: std::path::PathBuf) -> Result<(), ServiceError> {
        Err(ServiceError::Unsupported)
    }

    pub fn uninstall() -> Result<(), ServiceError> {
        Err(ServiceError::Unsupported)
    }

    pub fn start() -> Result<(), ServiceError> {
        Err(ServiceError::Unsupported)
    }

    pub fn stop() -> Result<(), ServiceError> {
        Err(ServiceError::Unsupported)
    }

    pub fn status() -> Result<ServiceState, ServiceError> {
        Err(ServiceError::Unsupported)
    }
}

#[cfg(windows)]
pub use windows_impl::install;
#[cfg(windows)]
pub use windows_impl::start;
#[cfg(windows)]
pub use windows_impl::status;
#[cfg(windows)]
pub use windows_impl::stop;
#[cfg(windows)]
pub use windows_impl::uninstall;

#[cfg(not(windows))]
pub use stub_impl::install;
#[cfg(not(windows))]
pub use stub_impl::start;
#[cfg(not(windows))]
pub use stub_impl::status;
#[cfg(not(windows))]
pub use stub_impl::stop;
#[cfg(not(windows))]
pub use stub_impl::uninstall;

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(not(windows))]
    #[test]
    fn non_windows_operations_are_unsupported() {
        assert!(matches!(status(), Err(ServiceError::Unsupported)));
        assert!(matches!(start(), Err(ServiceError::Unsupported)));
        assert!(matches!(stop(), Err(ServiceError::Unsupported)));
        assert!(matches!(uninstall(), Err(ServiceError::Unsupported)));
        assert!(matches!(install(std::path::PathBuf::new()), Err(ServiceError::Unsupported)));
    }
}
