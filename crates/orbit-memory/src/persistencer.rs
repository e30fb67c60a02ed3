//! In-memory [`Persistencer`] reference implementation.

use std::collections::HashMap;

use async_trait::async_trait;
use orbit_core::error::PersistencerError;
use orbit_core::persistencer::Persistencer;
use orbit_core::task::Task;
use tokio::sync::RwLock;

pub struct MemoryPersistencer<P, O> {
    outputs: RwLock<HashMap<String, O>>,
    _payload: std::marker::PhantomData<P>,
}

impl<P, O> MemoryPersistencer<P, O> {
    pub fn new() -> Self {
        Self {
            outputs: RwLock::new(HashMap::new()),
            _payload: std::marker::PhantomData,
        }
    }
}

impl<P, O> Default for MemoryPersistencer<P, O> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<P: Send + Sync + Clone + 'static, O: Send + Sync + Clone + 'static> Persistencer
    for MemoryPersistencer<P, O>
{
    type Payload = P;
    type Output = O;

    async fn persist(&self, task: &Task<P>, output: O) -> Result<(), PersistencerError> {
        self.outputs.write().await.insert(task.id.clone(), output);
        Ok(())
    }

    async fn retrieve(&self, task: &Task<P>) -> Result<Option<O>, PersistencerError> {
        Ok(self.outputs.read().await.get(&task.id).cloned())
    }

    async fn delete(&self, task: &Task<P>) -> Result<(), PersistencerError> {
        self.outputs.write().await.remove(&task.id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn persist_then_retrieve_roundtrips() {
        let p: MemoryPersistencer<&str, u32> = MemoryPersistencer::new();
        let task = Task::new("t1", 0, "payload");
        p.persist(&task, 42).await.unwrap();
        assert_eq!(p.retrieve(&task).await.unwrap(), Some(42));
    }

    #[tokio::test]
    async fn delete_clears_output() {
        let p: MemoryPersistencer<&str, u32> = MemoryPersistencer::new();
        let task = Task::new("t1", 0, "payload");
        p.persist(&task, 42).await.unwrap();
        p.delete(&task).await.unwrap();
        assert_eq!(p.retrieve(&task).await.unwrap(), None);
    }
}
