//! Trace propagation across an inbound request and the outbound calls it makes

mod end_to_end;
