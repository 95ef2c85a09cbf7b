//! Token introspection.

use crate::core::client::ResourceClient;
use crate::core::reconcile::ChangeReport;
use crate::error::Result;

const LOOKUP_SELF: &str = "/v1/auth/token/lookup-self";

/// Look up the calling token. Never changes anything.
///
/// The report carries `token`: the lookup record, or `null` when the server
/// does not know the token.
pub fn lookup_self(client: &dyn ResourceClient) -> Result<ChangeReport> {
    let token = client.read(LOOKUP_SELF)?;

    let mut report = ChangeReport::new();
    report.set_output("token", token.unwrap_or_default());
    Ok(report)
}
