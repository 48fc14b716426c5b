/*!

`workshop-agents` contains what the workshop's custom-resource agents share: the client seams
over the AWS APIs they drive, the idempotent IAM bootstrap, bounded polling, and the
instance bootstrap script. The agent binaries themselves live under `src/bin`.

!*/

pub mod clients;
pub mod ensure;
pub mod retry;
pub mod script;
