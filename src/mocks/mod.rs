pub mod mock_i2c;
