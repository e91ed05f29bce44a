//! The circuit table, client session registry, and onion handshake logic
//! that together implement §4.3 of the relay protocol.

mod circuit;
mod err;
mod handshake;
mod session;

pub use circuit::{Circuit, CircuitTable, CircuitTableStats};
pub use err::{CircuitError, HandshakeError};
pub use handshake::{
    generate_circuit_id, open_extend_payload, open_relay_data, process_create_circuit,
    process_hello, seal_circuit_extended, seal_heartbeat_ack, seal_relay_data,
    CreateCircuitOutcome, ExtendRequest, HelloOutcome, HELLO_VERSION, STATUS_OK,
};
pub use session::{ClientSession, SessionTable};
