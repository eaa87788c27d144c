use std::sync::Arc;

use serde::Serialize;
use tracing::warn;
use uuid::Uuid;

use super::status::{with_latest_status, ActivityView};
use crate::database::{
    Activity, Category, DatabaseError, DepartmentSaga, Member, MemberFilter, Profile, Service, TrackerStore,
};

/// Categories listed on a department roster
pub const ROSTER_CATEGORIES: [Category; 3] = [Category::Officer, Category::Hod, Category::Ceo];

/// Names of secondary reads that failed and were served as empty lists
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Degraded(Vec<&'static str>);

impl Degraded {
    /// Unwrap a secondary read. Failures become an empty list and are recorded.
    fn settle<T>(&mut self, name: &'static str, user: Uuid, result: Result<Vec<T>, DatabaseError>) -> Vec<T> {
        match result {
            Ok(rows) => rows,
            Err(e) => {
                warn!(user_id = %user, query = name, error = %e, "secondary query failed; serving empty list");
                self.0.push(name);
                Vec::new()
            }
        }
    }
}

#[derive(Debug, Serialize)]
pub struct OfficerDashboard {
    pub user: Profile,
    pub services: Vec<Service>,
    pub activities: Vec<ActivityView>,
    pub degraded: Degraded,
}

/// HOD home, activities and analytics views share one data set
#[derive(Debug, Serialize)]
pub struct DepartmentDashboard {
    pub user: Profile,
    pub activities: Vec<ActivityView>,
    pub officers: Vec<Member>,
    pub services: Vec<Service>,
    pub degraded: Degraded,
}

#[derive(Debug, Serialize)]
pub struct TeamDashboard {
    pub user: Profile,
    pub team_members: Vec<Member>,
    pub activity_stats: Vec<ActivityView>,
    pub degraded: Degraded,
}

#[derive(Debug, Serialize)]
pub struct AgDashboard {
    pub user: Profile,
    pub departments_sagas: Vec<DepartmentSaga>,
    pub activities: Vec<ActivityView>,
    pub officers: Vec<Member>,
    pub services: Vec<Service>,
    pub degraded: Degraded,
}

/// Department-scoped query composition for authorized profiles
#[derive(Clone)]
pub struct DashboardService {
    store: Arc<dyn TrackerStore>,
}

impl DashboardService {
    pub fn new(store: Arc<dyn TrackerStore>) -> Self {
        Self { store }
    }

    /// Officer home: department services plus the officer's own activities
    pub async fn officer(&self, user: Profile) -> OfficerDashboard {
        let mut degraded = Degraded::default();

        let (services, activities) = tokio::join!(
            self.services_of(user.department_saga_id),
            self.store.officer_activities(user.id),
        );
        let services = degraded.settle("services", user.id, services);
        let activities = degraded.settle("activities", user.id, activities);
        let activities = self.enrich(user.id, activities, &mut degraded).await;

        OfficerDashboard {
            user,
            services,
            activities,
            degraded,
        }
    }

    /// HOD/CEO department view: activities across the department's services
    pub async fn department(&self, user: Profile) -> DepartmentDashboard {
        let mut degraded = Degraded::default();

        let services = self.services_of(user.department_saga_id).await;
        let services = degraded.settle("services", user.id, services);
        let service_ids: Vec<i64> = services.iter().map(|s| s.id).collect();

        let (activities, officers) = tokio::join!(
            self.store.service_activities(&service_ids),
            self.roster_of(user.department_saga_id),
        );
        let activities = degraded.settle("activities", user.id, activities);
        let officers = degraded.settle("officers", user.id, officers);
        let activities = self.enrich(user.id, activities, &mut degraded).await;

        DepartmentDashboard {
            user,
            activities,
            officers,
            services,
            degraded,
        }
    }

    /// HOD/CEO team view: roster plus per-activity status for the department
    pub async fn team(&self, user: Profile) -> TeamDashboard {
        let mut degraded = Degraded::default();

        let (team_members, services) = tokio::join!(
            self.roster_of(user.department_saga_id),
            self.services_of(user.department_saga_id),
        );
        let team_members = degraded.settle("team_members", user.id, team_members);
        let services = degraded.settle("services", user.id, services);
        let service_ids: Vec<i64> = services.iter().map(|s| s.id).collect();

        let activities = self.store.service_activities(&service_ids).await;
        let activities = degraded.settle("activity_stats", user.id, activities);
        let activity_stats = self.enrich(user.id, activities, &mut degraded).await;

        TeamDashboard {
            user,
            team_members,
            activity_stats,
            degraded,
        }
    }

    /// AG overview: every department, activity, officer and service
    pub async fn ag(&self, user: Profile) -> AgDashboard {
        let mut degraded = Degraded::default();
        let officers_filter = MemberFilter::everywhere(&[Category::Officer]);

        let (departments_sagas, activities, officers, services) = tokio::join!(
            self.store.departments(),
            self.store.activities(),
            self.store.members(&officers_filter),
            self.store.services(),
        );
        let departments_sagas = degraded.settle("departments_sagas", user.id, departments_sagas);
        let activities = degraded.settle("activities", user.id, activities);
        let officers = degraded.settle("officers", user.id, officers);
        let services = degraded.settle("services", user.id, services);
        let activities = self.enrich(user.id, activities, &mut degraded).await;

        AgDashboard {
            user,
            departments_sagas,
            activities,
            officers,
            services,
            degraded,
        }
    }

    async fn services_of(&self, department_saga_id: Option<i64>) -> Result<Vec<Service>, DatabaseError> {
        match department_saga_id {
            Some(id) => self.store.department_services(id).await,
            None => Ok(Vec::new()),
        }
    }

    async fn roster_of(&self, department_saga_id: Option<i64>) -> Result<Vec<Member>, DatabaseError> {
        match department_saga_id {
            Some(id) => {
                self.store
                    .members(&MemberFilter::department(id, &ROSTER_CATEGORIES))
                    .await
            }
            None => Ok(Vec::new()),
        }
    }

    /// Fetch current statuses separately and fold them on, one per activity
    async fn enrich(&self, user: Uuid, activities: Vec<Activity>, degraded: &mut Degraded) -> Vec<ActivityView> {
        let ids: Vec<i64> = activities.iter().map(|a| a.id).collect();
        let statuses = self.store.latest_statuses(&ids).await;
        let statuses = degraded.settle("activity_status", user, statuses);
        with_latest_status(activities, statuses)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{at, profile, InMemoryStore};

    fn service(store: &InMemoryStore) -> DashboardService {
        DashboardService::new(Arc::new(store.clone()))
    }

    #[tokio::test]
    async fn team_view_records_each_failed_read() {
        let store = InMemoryStore::with_department(1, "Treasury");
        store.insert_service(10, "Audit", Some(1));
        store.fail("members");
        store.fail("activities");

        let view = service(&store).team(profile("HOD", Some(1))).await;
        assert!(view.team_members.is_empty());
        assert!(view.activity_stats.is_empty());
        assert_eq!(view.degraded, Degraded(vec!["team_members", "activity_stats"]));
    }

    #[tokio::test]
    async fn officer_view_without_department_lists_no_services() {
        let store = InMemoryStore::with_department(1, "Treasury");
        store.insert_service(10, "Audit", Some(1));
        let officer = profile("Officer", None);
        store.insert_activity(7, officer.id, Some(10), at(0));

        let view = service(&store).officer(officer).await;
        assert!(view.services.is_empty());
        assert_eq!(view.activities.len(), 1);
        assert_eq!(view.degraded, Degraded::default());
    }

    #[tokio::test]
    async fn ag_view_keeps_successful_lists_when_one_fails() {
        let store = InMemoryStore::with_department(1, "Treasury");
        store.insert_department(2, "Kenya Ports", "SAGA");
        store.fail("services");

        let view = service(&store).ag(profile("AG", None)).await;
        assert_eq!(view.departments_sagas.len(), 2);
        assert!(view.services.is_empty());
        assert_eq!(view.degraded, Degraded(vec!["services"]));
    }
}
