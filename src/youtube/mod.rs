mod client;

pub use client::YtDlpSource;
