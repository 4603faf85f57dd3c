// Adapters that connect the API clients to the coordinator's source traits.
pub mod github;
pub mod sonarcloud;

pub use github::GitHubProvider;
pub use sonarcloud::SonarProvider;
