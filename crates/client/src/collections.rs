use tenderbid_core::config::TenantConfig;
use tenderbid_core::TenderId;
use tenderbid_store::CollectionPath;

/// The tenant-namespaced collection paths one session works against.
#[derive(Clone, Debug)]
pub struct Collections {
    app_id: String,
    partition: String,
}

impl Collections {
    pub fn new(tenant: &TenantConfig) -> Self {
        Self { app_id: tenant.app_id.clone(), partition: tenant.partition.clone() }
    }

    pub fn tenders(&self) -> CollectionPath {
        CollectionPath::new(&self.app_id, &self.partition, "tenders")
    }

    pub fn bids(&self) -> CollectionPath {
        CollectionPath::new(&self.app_id, &self.partition, "bids")
    }

    /// Chat is namespaced per tender; each tender gets its own collection.
    pub fn chat(&self, tender_id: &TenderId) -> CollectionPath {
        CollectionPath::new(&self.app_id, &self.partition, &format!("tender-chat/{}", tender_id.0))
    }
}

#[cfg(test)]
mod tests {
    use tenderbid_core::config::TenantConfig;
    use tenderbid_core::TenderId;

    use super::Collections;

    #[test]
    fn paths_carry_the_tenant_namespace() {
        let collections = Collections::new(&TenantConfig {
            app_id: "tenderbid-local".to_string(),
            partition: "public".to_string(),
        });

        assert_eq!(collections.tenders().as_str(), "apps/tenderbid-local/public/tenders");
        assert_eq!(collections.bids().as_str(), "apps/tenderbid-local/public/bids");
        assert_eq!(
            collections.chat(&TenderId("t-1".to_string())).as_str(),
            "apps/tenderbid-local/public/tender-chat/t-1"
        );
    }
}
