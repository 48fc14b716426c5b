/*!

This module provides the client that delivers lifecycle outcomes back to the invoking
CloudFormation stack.

!*/

mod callback_client;
mod error;

pub use callback_client::{CallbackClient, DefaultCallbackClient};
pub use error::{ClientError, ClientResult};
