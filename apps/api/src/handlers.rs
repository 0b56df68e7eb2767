pub mod config;
pub mod creds;
pub mod health;
pub mod leases;
pub mod roles;

#[cfg(test)]
mod tests;
