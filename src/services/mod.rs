/// External collaborator boundaries: display-name lookup and the ranked
/// score store. Sessions talk to these through traits so the in-memory
/// implementations can be swapped for real infrastructure.

pub mod accounts;
pub mod scores;
