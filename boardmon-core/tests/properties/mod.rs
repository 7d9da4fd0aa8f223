mod address_tests;
mod history_tests;
