pub const RECORDS_ROUTED: &str = "bus_consumer_records_routed_total";
pub const PARTITION_EOF_EVENTS: &str = "bus_consumer_partition_eof_total";
pub const PROCESSOR_ERRORS: &str = "bus_consumer_processor_errors_total";
pub const TRANSIENT_POLL_ERRORS: &str = "bus_consumer_transient_poll_errors_total";
pub const COMMIT_REQUESTS: &str = "bus_consumer_commit_requests_total";
pub const PARTITIONS_ASSIGNED: &str = "bus_consumer_partitions_assigned_total";
pub const PARTITIONS_REVOKED: &str = "bus_consumer_partitions_revoked_total";
pub const PROCESSORS_CREATED: &str = "bus_consumer_processors_created_total";
