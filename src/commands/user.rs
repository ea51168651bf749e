use anyhow::Result;

use crate::commands::{CommandReport, effective_settings};
use crate::digest::providers::ProviderRegistry;
use crate::digest::transport::HttpTransport;
use crate::digest::users::UserDirectory;

pub fn run(usernames: &[String]) -> Result<CommandReport> {
    let settings = effective_settings(&ProviderRegistry::builtin())?;
    let transport = HttpTransport::new()?;
    let mut directory = UserDirectory::new(&transport, &settings.endpoints.user_api_base);
    let mut report = CommandReport::new("user");

    for name in usernames {
        match directory.lookup(name) {
            Ok(Some(profile)) => {
                let created = profile
                    .created_date()
                    .unwrap_or_else(|| "unknown".to_string());
                report.detail(format!(
                    "{} karma={} created={created}",
                    profile.username, profile.karma
                ));
                if let Some(about) = &profile.about {
                    let about = about.split_whitespace().collect::<Vec<_>>().join(" ");
                    report.detail(format!("  about: {about}"));
                }
            }
            Ok(None) => report.issue(format!("unknown user `{}`", name.trim())),
            Err(err) => report.issue(format!("lookup for `{}` failed: {err}", name.trim())),
        }
    }
    report.detail(format!("profiles_fetched={}", directory.memoized()));
    Ok(report)
}
