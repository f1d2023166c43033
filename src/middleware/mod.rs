pub mod device_id;
