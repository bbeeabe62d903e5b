mod contracts;
mod helpers;
mod mocks;
mod webhooks;
