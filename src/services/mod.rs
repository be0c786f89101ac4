pub mod payhero_service;
