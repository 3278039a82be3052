//! The lock guarding every table shared between admission and interrupt paths.
//!
//! A fair ticket lock by default; building without the `ticket_mutex` feature
//! swaps in a plain test-and-set lock. Neither is re-entrant: a holder must
//! drop its guard before calling into code that may lock the same table again
//! (page faults resolve through the same tables).

#[cfg(feature = "ticket_mutex")]
pub type Mutex<T> = spin::mutex::TicketMutex<T>;
#[cfg(feature = "ticket_mutex")]
pub type MutexGuard<'a, T> = spin::mutex::TicketMutexGuard<'a, T>;

#[cfg(not(feature = "ticket_mutex"))]
pub type Mutex<T> = spin::mutex::SpinMutex<T>;
#[cfg(not(feature = "ticket_mutex"))]
pub type MutexGuard<'a, T> = spin::mutex::SpinMutexGuard<'a, T>;
