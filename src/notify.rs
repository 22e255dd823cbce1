//! Telling the user about fatal settings errors.
//!
//! Backups usually run unattended, so a settings problem that stops a run is
//! also sent by mail (`notify`) and/or handed to a notifier command
//! (`notifier`, for example a desktop notification tool). Delivery is best
//! effort: failures are logged as warnings and never replace the original
//! error.
use crate::config::template::{self, Namespace};
use crate::config::{Identity, Mapping, Value};
use crate::exec::Executor;
use crate::PROGRAM_NAME;

/// Setting holding the mail address to notify.
pub const NOTIFY_SETTING: &str = "notify";
/// Setting holding the notifier command template.
pub const NOTIFIER_SETTING: &str = "notifier";

/// Send `msg` to every configured notification channel.
///
/// `settings` may be incomplete (that is usually why we are here), so values
/// are resolved where possible and shown raw otherwise.
pub fn report(settings: &Mapping, identity: &Identity, msg: &str, executor: &dyn Executor) {
    let namespace = Namespace::new(settings, identity);
    let lookup = |key: &str| -> String {
        settings.get(key).map_or_else(String::new, |v| {
            let raw = v.to_string();
            template::resolve(&raw, &namespace).unwrap_or(raw)
        })
    };

    let address = lookup(NOTIFY_SETTING);
    if !address.is_empty() {
        let subject = format!("{PROGRAM_NAME}: {msg}");
        let body = format!(
            "{msg}\n\
             config = {}\n\
             source = {}:{}\n\
             destination = {}:{}\n",
            lookup("config_name"),
            identity.host_name,
            lookup("src_dir"),
            lookup("dest_server"),
            lookup("dest_dir"),
        );
        if let Err(e) = executor.run_with_input("mail", &["-s", &subject, &address], &body) {
            tracing::warn!("could not send mail to {address}: {e:#}");
        }
    }

    if let Some(Value::Str(notifier)) = settings.get(NOTIFIER_SETTING)
        && !notifier.trim().is_empty()
    {
        let names: Namespace = [
            ("msg", msg),
            ("host_name", identity.host_name.as_str()),
            ("user_name", identity.user_name.as_str()),
            ("prog_name", PROGRAM_NAME),
        ]
        .into_iter()
        .collect();
        match template::format_once(notifier, &names) {
            Ok(command) => {
                if let Err(e) = executor.run_shell(&command) {
                    tracing::warn!("notifier failed: {e:#}");
                }
            }
            Err(e) => tracing::warn!("{NOTIFIER_SETTING}: {e}"),
        }
    }
}
