use crate::config::schema::ActionConfig;
use crate::error::Result;
use crate::module::CablecastModule;
use tracing::info;

/// Execute an action against the module.
///
/// Cursor actions act on the snapshot current at the time of the call.
///
/// # Errors
/// Returns `CastError` if firing a macro fails (incomplete config, HTTP
/// error or non-2xx response).
pub async fn execute(action: &ActionConfig, module: &CablecastModule) -> Result<()> {
    match action {
        ActionConfig::FireMacro { macro_id } => {
            info!("executing fire macro {macro_id}");
            module.fire_macro(macro_id).await
        }
        ActionConfig::NextEvent => {
            info!("selecting next event");
            module.next_event();
            Ok(())
        }
        ActionConfig::PreviousEvent => {
            info!("selecting previous event");
            module.previous_event();
            Ok(())
        }
        ActionConfig::SelectEvent { schedule_id } => {
            info!("selecting event {schedule_id}");
            module.select_event(*schedule_id);
            Ok(())
        }
    }
}
