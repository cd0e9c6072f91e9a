pub mod retries;
