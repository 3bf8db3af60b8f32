use log::info;
pub type TaskID = i32;

/// One unit of a long-lived activity. Returning `false` ends the task.
pub trait SteppableTask: Send + 'static {
    fn step(&mut self) -> bool;
}

pub struct ThreadManager {
    current_task_id: TaskID,
    tasks: std::collections::HashMap<TaskID, ManagedTask>,
}

impl ThreadManager {
    #[must_use]
    pub fn new() -> Self {
        ThreadManager {
            current_task_id: 0,
            tasks: std::collections::HashMap::new(),
        }
    }

    #[must_use]
    pub fn current_task_id(&self) -> TaskID {
        self.current_task_id
    }

    /// Runs `task` on its own thread called `name`, stepping it back to back.
    ///
    /// The task ends when `step` returns `false` or
    /// [`ThreadManager::stop_all_tasks`] is called. Tasks that wait on I/O do so
    /// inside `step` with a timeout so the stop signal is still seen.
    ///
    /// # Errors
    ///
    /// Returns the spawn error if the OS refuses to create the thread.
    pub fn add_task<T>(&mut self, name: &str, task: T) -> std::io::Result<TaskID>
    where
        T: SteppableTask,
    {
        let id = self.current_task_id;

        let (stop_sender, stop_receiver) = crossbeam_channel::bounded::<()>(1);

        let handle = std::thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                run_task_continuously(task, &stop_receiver);
            })?;
        info!("ThreadManager: started task {id} ({name})");
        self.tasks.insert(
            id,
            ManagedTask {
                name: name.to_string(),
                handle,
                stop_sender,
            },
        );
        self.current_task_id += 1;
        Ok(id)
    }

    pub fn stop_all_tasks(&self) {
        info!("ThreadManager: Signaling all tasks to stop...");
        for task in self.tasks.values() {
            let _ = task.stop_sender.send(());
        }
    }

    pub fn wait_on_task_finish(&mut self, task_id: TaskID) {
        if let Some(task) = self.tasks.remove(&task_id) {
            if task.handle.join().is_err() {
                log::error!("ThreadManager: task {task_id} ({}) panicked", task.name);
            }
        }
    }

    /// Stops every task and waits for all of them to exit.
    pub fn shutdown(&mut self) {
        self.stop_all_tasks();
        let mut ids: Vec<TaskID> = self.tasks.keys().copied().collect();
        ids.sort_unstable();
        for id in ids {
            self.wait_on_task_finish(id);
        }
    }
}

impl Default for ThreadManager {
    fn default() -> Self {
        ThreadManager::new()
    }
}

fn run_task_continuously<T: SteppableTask>(
    mut task: T,
    stop_receiver: &crossbeam_channel::Receiver<()>,
) {
    loop {
        match stop_receiver.try_recv() {
            Ok(()) | Err(crossbeam_channel::TryRecvError::Disconnected) => break,
            Err(crossbeam_channel::TryRecvError::Empty) => {}
        }

        if !task.step() {
            break;
        }

        std::thread::yield_now();
    }
}

struct ManagedTask {
    name: String,
    handle: std::thread::JoinHandle<()>,
    stop_sender: crossbeam_channel::Sender<()>,
}

#[cfg(test)]
mod tests {
    use super::{SteppableTask, ThreadManager};

    // Counts its own steps and stops itself at the limit
    #[derive(Debug)]
    struct CountingTask {
        count: usize,
        limit: usize,
        sender: crossbeam_channel::Sender<usize>,
    }

    impl CountingTask {
        fn new(limit: usize, sender: crossbeam_channel::Sender<usize>) -> Self {
            Self {
                count: 0,
                limit,
                sender,
            }
        }
    }

    impl SteppableTask for CountingTask {
        fn step(&mut self) -> bool {
            self.count += 1;
            let _ = self.sender.send(self.count);
            self.count < self.limit
        }
    }

    // Runs until stopped externally
    #[derive(Debug)]
    struct LoopingTask {
        sender: crossbeam_channel::Sender<String>,
    }

    impl SteppableTask for LoopingTask {
        fn step(&mut self) -> bool {
            let name = std::thread::current().name().unwrap_or_default().to_string();
            let _ = self.sender.send(name);
            std::thread::sleep(std::time::Duration::from_millis(1));
            true
        }
    }

    #[test]
    fn when_multiple_tasks_added_then_all_tasks_completed() {
        let mut manager = ThreadManager::new();
        let (counter_1_sender, counter_1_receiver) = crossbeam_channel::unbounded();
        let (counter_2_sender, counter_2_receiver) = crossbeam_channel::unbounded();

        let task_1_id = manager
            .add_task("counter-1", CountingTask::new(5, counter_1_sender))
            .expect("spawn");
        let task_2_id = manager
            .add_task("counter-2", CountingTask::new(10, counter_2_sender))
            .expect("spawn");

        manager.wait_on_task_finish(task_2_id);
        manager.wait_on_task_finish(task_1_id);

        assert!(manager.tasks.is_empty());
        assert_eq!(counter_1_receiver.try_iter().count(), 5);
        assert_eq!(counter_2_receiver.try_iter().count(), 10);
    }

    #[test]
    fn when_task_added_then_thread_carries_its_name() {
        let mut manager = ThreadManager::new();
        let (sender, receiver) = crossbeam_channel::unbounded();

        manager
            .add_task("feed-ingestor", LoopingTask { sender })
            .expect("spawn");

        let name = receiver
            .recv_timeout(std::time::Duration::from_secs(5))
            .expect("task stepped");
        manager.shutdown();

        assert_eq!(name, "feed-ingestor");
    }

    #[test]
    fn when_shutdown_called_then_looping_tasks_exit() {
        let mut manager = ThreadManager::new();
        let (sender, receiver) = crossbeam_channel::unbounded();

        manager
            .add_task(
                "looper-1",
                LoopingTask {
                    sender: sender.clone(),
                },
            )
            .expect("spawn");
        manager
            .add_task("looper-2", LoopingTask { sender })
            .expect("spawn");
        assert_eq!(manager.current_task_id(), 2);

        std::thread::sleep(std::time::Duration::from_millis(100));
        manager.shutdown();

        assert!(manager.tasks.is_empty());
        assert!(receiver.try_iter().count() > 0);
    }

    #[test]
    fn when_wait_on_task_finish_called_then_task_id_removed() {
        let mut manager = ThreadManager::new();
        let (sender, _receiver) = crossbeam_channel::unbounded();

        let task_id1 = manager
            .add_task(
                "looper-1",
                LoopingTask {
                    sender: sender.clone(),
                },
            )
            .expect("spawn");
        let task_id2 = manager
            .add_task("looper-2", LoopingTask { sender })
            .expect("spawn");

        assert_eq!(manager.tasks.len(), 2);

        manager.stop_all_tasks();
        manager.wait_on_task_finish(task_id1);

        assert_eq!(manager.tasks.len(), 1);
        assert!(manager.tasks.contains_key(&task_id2));
        assert!(!manager.tasks.contains_key(&task_id1));

        manager.wait_on_task_finish(task_id2);
        assert!(manager.tasks.is_empty());
    }
}
