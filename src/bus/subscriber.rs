use std::sync::Arc;
use super::topic::Topic;
use super::Message;

//each subscriber keeps its own cursor, so several readers see every message
pub struct Subscriber<T: Message>{
    topic: Arc<Topic<T>>,
    cursor: u64,
}

impl<T: Message> Subscriber<T>{
    pub fn new(topic: Arc<Topic<T>>) -> Self{
        Subscriber{ topic, cursor: 0 }
    }

    //next unseen message; messages dropped by overflow are skipped
    pub fn try_recv(&mut self) -> Option<T>{
        let (msg, epoch) = self.topic.next_after(self.cursor)?;
        self.cursor = epoch;
        Some(msg)
    }

    pub fn topic_name(&self) -> &str{
        self.topic.name()
    }
}

#[cfg(test)]
mod tests{
    use super::*;

    #[test]
    fn test_subscriber_try_recv(){
        let topic = Arc::new(Topic::<i32>::new("/test", 8));
        let mut subscriber = Subscriber::new(Arc::clone(&topic));

        topic.publish(10);
        topic.publish(20);

        assert_eq!(subscriber.try_recv(), Some(10));
        assert_eq!(subscriber.try_recv(), Some(20));
        assert_eq!(subscriber.try_recv(), None);
    }

    #[test]
    fn test_overflow_skips_dropped_messages(){
        let topic = Arc::new(Topic::<i32>::new("/test", 2));
        let mut subscriber = Subscriber::new(Arc::clone(&topic));

        for v in 1..=5{
            topic.publish(v);
        }
        assert_eq!(subscriber.try_recv(), Some(4));
        assert_eq!(subscriber.try_recv(), Some(5));
        assert_eq!(subscriber.try_recv(), None);
    }

    #[test]
    fn test_independent_cursors(){
        let topic = Arc::new(Topic::<i32>::new("/test", 8));
        let mut a = Subscriber::new(Arc::clone(&topic));
        let mut b = Subscriber::new(Arc::clone(&topic));

        topic.publish(1);
        assert_eq!(a.try_recv(), Some(1));
        assert_eq!(b.try_recv(), Some(1));
        assert_eq!(a.topic_name(), "/test");
    }
}
