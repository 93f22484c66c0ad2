mod admin_test;
mod auth_test;
mod health_test;
mod jobs_test;
mod tickets_test;
mod webhooks_test;
