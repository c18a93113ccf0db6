pub mod errors;
pub mod db;
pub mod app_namespace_store;

#[cfg(test)]
mod tests;
