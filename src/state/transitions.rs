use crate::{
    error::ServiceError,
    services::sse_events::broadcast_phase_changed,
    state::{RoomHandle, SharedState, state_machine::RoomEvent},
};

/// Execute a planned state-machine transition, then broadcast the resulting phase change.
pub async fn run_transition_with_broadcast<F, Fut, T>(
    state: &SharedState,
    room: &RoomHandle,
    event: RoomEvent,
    work: F,
) -> Result<T, ServiceError>
where
    F: FnOnce() -> Fut,
    Fut: std::future::Future<Output = Result<T, ServiceError>>,
{
    let (res, _next) = room.run_transition(event, work).await?;
    broadcast_phase_changed(state, room).await;
    Ok(res)
}
