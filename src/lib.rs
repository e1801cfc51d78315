pub mod collectors;
pub mod db;
pub mod domain;
pub mod models;
pub mod processing;
pub mod repository;
pub mod search;
