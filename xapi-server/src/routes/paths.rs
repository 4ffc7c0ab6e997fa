macro_rules! v1_path {
    ($path:literal) => {
        concat!("/api/v1", $path)
    };
}

/// Public paths, shared by the router and its tests.
pub mod v1 {
    pub const ROOT: &str = "/api/v1";

    pub mod assets {
        pub const COLLECTION: &str = v1_path!("/assets");
        pub const COLLECTION_SLASH: &str = v1_path!("/assets/");
        pub const TEST_CONNECTION: &str = v1_path!("/assets/test-connection");
    }
}

pub const PING: &str = "/ping";
