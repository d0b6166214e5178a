//! Detection of hosting platforms that already compress responses

use std::fmt;

/// Hosting platform whose edge transparently compresses responses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    /// Deno Deploy, detected through `DENO_DEPLOYMENT_ID`
    DenoDeploy,
    /// Vercel functions, detected through `VERCEL`
    Vercel,
    /// Render web services, detected through `RENDER`
    Render,
}

impl Platform {
    /// Every platform that is probed, in probe order
    pub const ALL: [Platform; 3] = [Platform::DenoDeploy, Platform::Vercel, Platform::Render];

    /// Environment variable whose presence identifies the platform
    pub fn signal(&self) -> &'static str {
        match self {
            Platform::DenoDeploy => "DENO_DEPLOYMENT_ID",
            Platform::Vercel => "VERCEL",
            Platform::Render => "RENDER",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Platform::DenoDeploy => f.write_str("deno-deploy"),
            Platform::Vercel => f.write_str("vercel"),
            Platform::Render => f.write_str("render"),
        }
    }
}

/// Execution environment, probed once when the capability registry is built
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Environment {
    platform: Option<Platform>,
}

impl Environment {
    /// Probe the process environment
    pub fn detect() -> Self {
        Self::from_lookup(|name| std::env::var_os(name).is_some_and(|v| !v.is_empty()))
    }

    /// Probe using a custom variable lookup
    pub fn from_lookup(is_set: impl Fn(&str) -> bool) -> Self {
        let platform = Platform::ALL
            .into_iter()
            .find(|platform| is_set(platform.signal()));
        Self { platform }
    }

    /// Environment running on the given platform
    pub fn on(platform: Platform) -> Self {
        Self {
            platform: Some(platform),
        }
    }

    /// Detected platform, if any
    pub fn platform(&self) -> Option<Platform> {
        self.platform
    }

    /// Whether responses are compressed further down the line anyway
    pub fn compresses_responses(&self) -> bool {
        self.platform.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_platform() {
        let env = Environment::from_lookup(|_| false);
        assert_eq!(env.platform(), None);
        assert!(!env.compresses_responses());
        assert_eq!(env, Environment::default());
    }

    #[test]
    fn test_each_signal_detected() {
        for platform in Platform::ALL {
            let env = Environment::from_lookup(|name| name == platform.signal());
            assert_eq!(env.platform(), Some(platform));
            assert!(env.compresses_responses());
        }
    }

    #[test]
    fn test_deno_deploy_detected() {
        let env = Environment::from_lookup(|name| name == "DENO_DEPLOYMENT_ID");
        assert_eq!(env.platform(), Some(Platform::DenoDeploy));
        assert_eq!(env.platform().map(|p| p.to_string()).as_deref(), Some("deno-deploy"));
    }

    #[test]
    fn test_signals_are_distinct() {
        assert_ne!(Platform::DenoDeploy.signal(), Platform::Vercel.signal());
        assert_ne!(Platform::Vercel.signal(), Platform::Render.signal());
        assert_eq!(Environment::on(Platform::Render).platform(), Some(Platform::Render));
    }
}
