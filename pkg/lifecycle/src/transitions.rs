use pkg_types::instance::InstanceState;

/// Declared lifecycle operations. Each trigger has a fixed set of legal
/// source states and exactly one target state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Trigger {
    BeginProvisioning,
    SetOffline,
    ScheduleStarting,
    BeginStarting,
    SetOnline,
    ScheduleStopping,
    BeginStopping,
    ScheduleDeletion,
    BeginDeleting,
    ScheduleResizing,
    BeginResizing,
    SetResized,
    ScheduleRestarting,
    BeginRestarting,
    SetRestarted,
    SetErred,
}

impl Trigger {
    /// Every trigger, for exhaustive table checks.
    pub const ALL: [Trigger; 16] = [
        Trigger::BeginProvisioning,
        Trigger::SetOffline,
        Trigger::ScheduleStarting,
        Trigger::BeginStarting,
        Trigger::SetOnline,
        Trigger::ScheduleStopping,
        Trigger::BeginStopping,
        Trigger::ScheduleDeletion,
        Trigger::BeginDeleting,
        Trigger::ScheduleResizing,
        Trigger::BeginResizing,
        Trigger::SetResized,
        Trigger::ScheduleRestarting,
        Trigger::BeginRestarting,
        Trigger::SetRestarted,
        Trigger::SetErred,
    ];
}

impl std::fmt::Display for Trigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Trigger::BeginProvisioning => "begin_provisioning",
            Trigger::SetOffline => "set_offline",
            Trigger::ScheduleStarting => "schedule_starting",
            Trigger::BeginStarting => "begin_starting",
            Trigger::SetOnline => "set_online",
            Trigger::ScheduleStopping => "schedule_stopping",
            Trigger::BeginStopping => "begin_stopping",
            Trigger::ScheduleDeletion => "schedule_deletion",
            Trigger::BeginDeleting => "begin_deleting",
            Trigger::ScheduleResizing => "schedule_resizing",
            Trigger::BeginResizing => "begin_resizing",
            Trigger::SetResized => "set_resized",
            Trigger::ScheduleRestarting => "schedule_restarting",
            Trigger::BeginRestarting => "begin_restarting",
            Trigger::SetRestarted => "set_restarted",
            Trigger::SetErred => "set_erred",
        };
        f.write_str(label)
    }
}

/// The transition table: the unique target of `trigger` from `state`, or
/// `None` when the edge does not exist. `SetErred` is legal from any state.
pub fn target_for(state: InstanceState, trigger: Trigger) -> Option<InstanceState> {
    use InstanceState as S;
    use Trigger as T;
    match (trigger, state) {
        (T::BeginProvisioning, S::ProvisioningScheduled) => Some(S::Provisioning),
        (T::SetOffline, S::Provisioning | S::Stopping | S::Resizing) => Some(S::Offline),
        (T::ScheduleStarting, S::Offline) => Some(S::StartingScheduled),
        (T::BeginStarting, S::StartingScheduled) => Some(S::Starting),
        (T::SetOnline, S::Starting | S::Provisioning | S::Restarting) => Some(S::Online),
        (T::ScheduleStopping, S::Online) => Some(S::StoppingScheduled),
        (T::BeginStopping, S::StoppingScheduled) => Some(S::Stopping),
        (T::ScheduleDeletion, S::Offline) => Some(S::DeletionScheduled),
        (T::BeginDeleting, S::DeletionScheduled) => Some(S::Deleting),
        (T::ScheduleResizing, S::Offline) => Some(S::ResizingScheduled),
        (T::BeginResizing, S::ResizingScheduled) => Some(S::Resizing),
        (T::SetResized, S::Resizing) => Some(S::Offline),
        (T::ScheduleRestarting, S::Online) => Some(S::RestartingScheduled),
        (T::BeginRestarting, S::RestartingScheduled) => Some(S::Restarting),
        (T::SetRestarted, S::Restarting) => Some(S::Online),
        (T::SetErred, _) => Some(S::Erred),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use InstanceState as S;
    use Trigger as T;

    /// Independent statement of the table: (trigger, legal sources, target).
    const EDGES: [(T, &[S], S); 15] = [
        (T::BeginProvisioning, &[S::ProvisioningScheduled], S::Provisioning),
        (T::SetOffline, &[S::Provisioning, S::Stopping, S::Resizing], S::Offline),
        (T::ScheduleStarting, &[S::Offline], S::StartingScheduled),
        (T::BeginStarting, &[S::StartingScheduled], S::Starting),
        (T::SetOnline, &[S::Starting, S::Provisioning, S::Restarting], S::Online),
        (T::ScheduleStopping, &[S::Online], S::StoppingScheduled),
        (T::BeginStopping, &[S::StoppingScheduled], S::Stopping),
        (T::ScheduleDeletion, &[S::Offline], S::DeletionScheduled),
        (T::BeginDeleting, &[S::DeletionScheduled], S::Deleting),
        (T::ScheduleResizing, &[S::Offline], S::ResizingScheduled),
        (T::BeginResizing, &[S::ResizingScheduled], S::Resizing),
        (T::SetResized, &[S::Resizing], S::Offline),
        (T::ScheduleRestarting, &[S::Online], S::RestartingScheduled),
        (T::BeginRestarting, &[S::RestartingScheduled], S::Restarting),
        (T::SetRestarted, &[S::Restarting], S::Online),
    ];

    #[test]
    fn table_is_closed_over_every_state_and_trigger() {
        for state in S::ALL {
            for trigger in T::ALL {
                let expected = if trigger == T::SetErred {
                    Some(S::Erred)
                } else {
                    EDGES
                        .iter()
                        .find(|(t, sources, _)| *t == trigger && sources.contains(&state))
                        .map(|(_, _, target)| *target)
                };
                assert_eq!(
                    target_for(state, trigger),
                    expected,
                    "({state:?}, {trigger:?})"
                );
            }
        }
    }

    #[test]
    fn erred_is_reachable_from_anywhere_and_is_a_sink() {
        for state in S::ALL {
            assert_eq!(target_for(state, T::SetErred), Some(S::Erred));
        }
        for trigger in T::ALL {
            if trigger != T::SetErred {
                assert_eq!(target_for(S::Erred, trigger), None);
            }
        }
    }

    #[test]
    fn provisioning_to_stopped_walk() {
        let mut state = S::ProvisioningScheduled;
        for trigger in [
            T::BeginProvisioning,
            T::SetOnline,
            T::ScheduleStopping,
            T::BeginStopping,
            T::SetOffline,
        ] {
            state = target_for(state, trigger).unwrap();
        }
        assert_eq!(state, S::Offline);
        // Skipping schedule_starting/begin_starting is not allowed.
        assert_eq!(target_for(state, T::SetOnline), None);
    }
}
