//! Top-level navigation as an explicit state machine.

use std::fmt;

/// Where the user is in the app.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// No session; only sign-in and sign-up are reachable.
    Unauthenticated,
    /// Signed in, but no household selected yet.
    Onboarding,
    /// Signed in with an active household.
    Authenticated { household_id: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteEvent {
    SignedIn { active_household: Option<String> },
    SignedOut,
    HouseholdSelected(String),
    HouseholdCleared,
}

impl Route {
    /// Initial route at launch, from the stored session and household selection.
    pub fn launch(has_session: bool, active_household: Option<&str>) -> Self {
        if has_session {
            Route::Unauthenticated.on(RouteEvent::SignedIn {
                active_household: active_household.map(str::to_string),
            })
        } else {
            Route::Unauthenticated
        }
    }

    pub fn on(self, event: RouteEvent) -> Self {
        match (self, event) {
            (_, RouteEvent::SignedOut) => Route::Unauthenticated,
            (_, RouteEvent::SignedIn { active_household }) => match active_household {
                Some(household_id) if !household_id.is_empty() => {
                    Route::Authenticated { household_id }
                }
                _ => Route::Onboarding,
            },
            (Route::Unauthenticated, RouteEvent::HouseholdSelected(_) | RouteEvent::HouseholdCleared) => {
                Route::Unauthenticated
            }
            (_, RouteEvent::HouseholdSelected(household_id)) => Route::Authenticated { household_id },
            (_, RouteEvent::HouseholdCleared) => Route::Onboarding,
        }
    }

    pub fn household_id(&self) -> Option<&str> {
        match self {
            Route::Authenticated { household_id } => Some(household_id),
            _ => None,
        }
    }

    pub fn is_signed_in(&self) -> bool {
        !matches!(self, Route::Unauthenticated)
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Route::Unauthenticated => f.write_str("signed out"),
            Route::Onboarding => f.write_str("signed in, no household selected"),
            Route::Authenticated { household_id } => {
                write!(f, "signed in, household {household_id}")
            }
        }
    }
}
