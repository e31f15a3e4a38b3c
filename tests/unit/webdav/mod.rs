mod date_tests;
mod mock_transport;
