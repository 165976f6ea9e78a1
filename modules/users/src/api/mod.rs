pub mod gateway;
pub mod reply;
pub mod rest;
pub mod routes;
