//! Client library and console front end for the Microsoft Bookings OData API

pub mod api;
pub mod config;
