use std::{
    io,
    net::{Ipv4Addr, TcpListener},
};

/// Asks the kernel for a free TCP port.
///
/// A listener is bound to port `0` on all interfaces, the assigned port is read back and the
/// listener is closed before returning. The standard library enables `SO_REUSEADDR` on unix
/// listeners, so the port can be rebound right away by the process it is handed to.
///
/// Nothing holds the port between this call and the moment another process binds it. Another
/// socket could take it in that window.
pub fn allocate_free_port() -> io::Result<u16> {
    let listener = TcpListener::bind((Ipv4Addr::UNSPECIFIED, 0))?;
    let port = listener.local_addr()?.port();
    drop(listener);
    tracing::trace!(port, "Allocated a free port");
    Ok(port)
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn allocated_port_is_not_zero() {
        let port = allocate_free_port().expect("Failed to allocate a port");
        assert_ne!(port, 0);
    }

    #[test]
    fn allocated_port_can_be_bound_again() {
        // Arrange
        let port = allocate_free_port().expect("Failed to allocate a port");

        // Act
        let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, port));

        // Assert
        assert!(listener.is_ok(), "port {port} could not be rebound");
    }

    #[test]
    fn tight_allocation_loop_does_not_trivially_collide() {
        // Arrange
        const ALLOCATIONS: usize = 200;

        // Act
        let ports = (0..ALLOCATIONS)
            .map(|_| allocate_free_port().expect("Failed to allocate a port"))
            .collect::<Vec<_>>();

        // Assert
        let distinct = ports.iter().collect::<HashSet<_>>().len();
        assert!(
            distinct * 10 >= ALLOCATIONS * 9,
            "only {distinct} distinct ports out of {ALLOCATIONS} allocations"
        );
    }
}
