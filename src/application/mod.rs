pub mod matching_service;
