// Generated by build.rs (`RUSTFLAGS="--cfg genproto" cargo build`) from proto/node.proto.
// Checked in so a normal build does not require protoc.

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetInfoRequest {}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetInfoResponse {
    #[prost(bytes = "vec", tag = "1")]
    pub identity_pubkey: ::prost::alloc::vec::Vec<u8>,
    #[prost(uint32, tag = "2")]
    pub block_height: u32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ListChannelsRequest {
    #[prost(bool, tag = "1")]
    pub active_only: bool,
    #[prost(bool, tag = "2")]
    pub public_only: bool,
    #[prost(bytes = "vec", tag = "3")]
    pub peer: ::prost::alloc::vec::Vec<u8>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct LocalChannel {
    #[prost(uint64, tag = "1")]
    pub chan_id: u64,
    #[prost(uint64, tag = "2")]
    pub capacity_sat: u64,
    #[prost(uint64, tag = "3")]
    pub local_balance_sat: u64,
    #[prost(uint64, tag = "4")]
    pub remote_balance_sat: u64,
    #[prost(bytes = "vec", tag = "5")]
    pub remote_pubkey: ::prost::alloc::vec::Vec<u8>,
    #[prost(bool, tag = "6")]
    pub active: bool,
    #[prost(bool, tag = "7")]
    pub public: bool,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ListChannelsResponse {
    #[prost(message, repeated, tag = "1")]
    pub channels: ::prost::alloc::vec::Vec<LocalChannel>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetChanInfoRequest {
    #[prost(uint64, tag = "1")]
    pub chan_id: u64,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RoutingPolicy {
    #[prost(uint64, tag = "1")]
    pub base_fee_msat: u64,
    #[prost(uint64, tag = "2")]
    pub fee_rate_ppm: u64,
    #[prost(uint64, tag = "3")]
    pub max_htlc_msat: u64,
    #[prost(bool, tag = "4")]
    pub disabled: bool,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ChannelEdge {
    #[prost(uint64, tag = "1")]
    pub chan_id: u64,
    #[prost(bytes = "vec", tag = "2")]
    pub node1_pubkey: ::prost::alloc::vec::Vec<u8>,
    #[prost(bytes = "vec", tag = "3")]
    pub node2_pubkey: ::prost::alloc::vec::Vec<u8>,
    #[prost(message, optional, tag = "4")]
    pub node1_policy: ::core::option::Option<RoutingPolicy>,
    #[prost(message, optional, tag = "5")]
    pub node2_policy: ::core::option::Option<RoutingPolicy>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetNodeInfoRequest {
    #[prost(bytes = "vec", tag = "1")]
    pub pubkey: ::prost::alloc::vec::Vec<u8>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct NodeInfo {
    #[prost(bytes = "vec", tag = "1")]
    pub pubkey: ::prost::alloc::vec::Vec<u8>,
    #[prost(string, tag = "2")]
    pub alias: ::prost::alloc::string::String,
    #[prost(uint32, tag = "3")]
    pub num_channels: u32,
    #[prost(uint64, tag = "4")]
    pub total_capacity_sat: u64,
    #[prost(int64, tag = "5")]
    pub last_update: i64,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct NodePair {
    #[prost(bytes = "vec", tag = "1")]
    pub from: ::prost::alloc::vec::Vec<u8>,
    #[prost(bytes = "vec", tag = "2")]
    pub to: ::prost::alloc::vec::Vec<u8>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct QueryRoutesRequest {
    #[prost(uint64, tag = "1")]
    pub outgoing_chan_id: u64,
    #[prost(bytes = "vec", tag = "2")]
    pub last_hop_pubkey: ::prost::alloc::vec::Vec<u8>,
    #[prost(uint64, tag = "3")]
    pub amt_msat: u64,
    #[prost(uint64, tag = "4")]
    pub fee_limit_msat: u64,
    #[prost(bool, tag = "5")]
    pub use_mission_control: bool,
    #[prost(message, repeated, tag = "6")]
    pub ignored_pairs: ::prost::alloc::vec::Vec<NodePair>,
    #[prost(bytes = "vec", repeated, tag = "7")]
    pub ignored_nodes: ::prost::alloc::vec::Vec<::prost::alloc::vec::Vec<u8>>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct QueryRoutesResponse {
    #[prost(message, repeated, tag = "1")]
    pub routes: ::prost::alloc::vec::Vec<Route>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct BuildRouteRequest {
    #[prost(uint64, tag = "1")]
    pub amt_msat: u64,
    #[prost(uint64, tag = "2")]
    pub outgoing_chan_id: u64,
    #[prost(bytes = "vec", repeated, tag = "3")]
    pub hop_pubkeys: ::prost::alloc::vec::Vec<::prost::alloc::vec::Vec<u8>>,
    #[prost(uint32, tag = "4")]
    pub final_cltv_delta: u32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Hop {
    #[prost(uint64, tag = "1")]
    pub chan_id: u64,
    #[prost(bytes = "vec", tag = "2")]
    pub next_hop_pubkey: ::prost::alloc::vec::Vec<u8>,
    #[prost(uint64, tag = "3")]
    pub amt_to_forward_msat: u64,
    #[prost(uint64, tag = "4")]
    pub fee_msat: u64,
    #[prost(uint32, tag = "5")]
    pub expiry_delta: u32,
    #[prost(bytes = "vec", tag = "6")]
    pub mpp_payment_addr: ::prost::alloc::vec::Vec<u8>,
    #[prost(uint64, tag = "7")]
    pub mpp_total_amt_msat: u64,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Route {
    #[prost(message, repeated, tag = "1")]
    pub hops: ::prost::alloc::vec::Vec<Hop>,
    #[prost(uint64, tag = "2")]
    pub total_amt_msat: u64,
    #[prost(uint64, tag = "3")]
    pub total_fees_msat: u64,
    #[prost(uint32, tag = "4")]
    pub total_time_lock: u32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct AddInvoiceRequest {
    #[prost(uint64, tag = "1")]
    pub value_sat: u64,
    #[prost(string, tag = "2")]
    pub memo: ::prost::alloc::string::String,
    #[prost(uint32, tag = "3")]
    pub expiry_seconds: u32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct AddInvoiceResponse {
    #[prost(bytes = "vec", tag = "1")]
    pub payment_addr: ::prost::alloc::vec::Vec<u8>,
    #[prost(bytes = "vec", tag = "2")]
    pub r_hash: ::prost::alloc::vec::Vec<u8>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum FailureCode {
    UnknownFailure = 0,
    TemporaryChannelFailure = 1,
    FeeInsufficient = 2,
    IncorrectCltvExpiry = 3,
    IncorrectOrUnknownPaymentDetails = 4,
    MppTimeout = 5,
}

impl FailureCode {
    pub fn as_str_name(&self) -> &'static str {
        match self {
            FailureCode::UnknownFailure => "UNKNOWN_FAILURE",
            FailureCode::TemporaryChannelFailure => "TEMPORARY_CHANNEL_FAILURE",
            FailureCode::FeeInsufficient => "FEE_INSUFFICIENT",
            FailureCode::IncorrectCltvExpiry => "INCORRECT_CLTV_EXPIRY",
            FailureCode::IncorrectOrUnknownPaymentDetails => {
                "INCORRECT_OR_UNKNOWN_PAYMENT_DETAILS"
            }
            FailureCode::MppTimeout => "MPP_TIMEOUT",
        }
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SendToRouteRequest {
    #[prost(bytes = "vec", tag = "1")]
    pub payment_hash: ::prost::alloc::vec::Vec<u8>,
    #[prost(message, optional, tag = "2")]
    pub route: ::core::option::Option<Route>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum PaymentStatus {
    Succeeded = 0,
    Failed = 1,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SendToRouteResponse {
    #[prost(enumeration = "PaymentStatus", tag = "1")]
    pub status: i32,
    #[prost(enumeration = "FailureCode", tag = "2")]
    pub failure_code: i32,
    #[prost(int32, tag = "3")]
    pub failure_source_index: i32,
}

pub mod node_client {
    use tonic::codegen::*;

    #[derive(Debug, Clone)]
    pub struct NodeClient<T> {
        inner: tonic::client::Grpc<T>,
    }

    impl<T> NodeClient<T>
    where
        T: tonic::client::GrpcService<tonic::body::BoxBody>,
        T::Error: Into<StdError>,
        T::ResponseBody: Body<Data = bytes::Bytes> + Send + 'static,
        <T::ResponseBody as Body>::Error: Into<StdError> + Send,
    {
        pub fn new(inner: T) -> Self {
            let inner = tonic::client::Grpc::new(inner);
            Self { inner }
        }

        pub fn with_interceptor<F>(
            inner: T,
            interceptor: F,
        ) -> NodeClient<tonic::service::interceptor::InterceptedService<T, F>>
        where
            F: tonic::service::Interceptor,
            T: tonic::codegen::Service<
                http::Request<tonic::body::BoxBody>,
                Response = http::Response<<T as tonic::client::GrpcService<tonic::body::BoxBody>>::ResponseBody>,
            >,
            <T as tonic::codegen::Service<http::Request<tonic::body::BoxBody>>>::Error:
                Into<StdError> + Send + Sync,
        {
            NodeClient::new(tonic::service::interceptor::InterceptedService::new(inner, interceptor))
        }

        async fn unary<Req, Resp>(
            &mut self,
            req: Req,
            path: &'static str,
            name: &'static str,
        ) -> Result<tonic::Response<Resp>, tonic::Status>
        where
            Req: ::prost::Message + 'static,
            Resp: ::prost::Message + Default + 'static,
        {
            self.inner.ready().await.map_err(|e| {
                tonic::Status::unknown(format!("Service was not ready: {}", e.into()))
            })?;
            let codec = tonic::codec::ProstCodec::default();
            let path = http::uri::PathAndQuery::from_static(path);
            let mut req = tonic::Request::new(req);
            req.extensions_mut()
                .insert(tonic::GrpcMethod::new("regolancer.Node", name));
            self.inner.unary(req, path, codec).await
        }

        pub async fn get_info(
            &mut self,
            req: super::GetInfoRequest,
        ) -> Result<tonic::Response<super::GetInfoResponse>, tonic::Status> {
            self.unary(req, "/regolancer.Node/GetInfo", "GetInfo").await
        }

        pub async fn list_channels(
            &mut self,
            req: super::ListChannelsRequest,
        ) -> Result<tonic::Response<super::ListChannelsResponse>, tonic::Status> {
            self.unary(req, "/regolancer.Node/ListChannels", "ListChannels").await
        }

        pub async fn get_chan_info(
            &mut self,
            req: super::GetChanInfoRequest,
        ) -> Result<tonic::Response<super::ChannelEdge>, tonic::Status> {
            self.unary(req, "/regolancer.Node/GetChanInfo", "GetChanInfo").await
        }

        pub async fn get_node_info(
            &mut self,
            req: super::GetNodeInfoRequest,
        ) -> Result<tonic::Response<super::NodeInfo>, tonic::Status> {
            self.unary(req, "/regolancer.Node/GetNodeInfo", "GetNodeInfo").await
        }

        pub async fn query_routes(
            &mut self,
            req: super::QueryRoutesRequest,
        ) -> Result<tonic::Response<super::QueryRoutesResponse>, tonic::Status> {
            self.unary(req, "/regolancer.Node/QueryRoutes", "QueryRoutes").await
        }

        pub async fn build_route(
            &mut self,
            req: super::BuildRouteRequest,
        ) -> Result<tonic::Response<super::Route>, tonic::Status> {
            self.unary(req, "/regolancer.Node/BuildRoute", "BuildRoute").await
        }

        pub async fn add_invoice(
            &mut self,
            req: super::AddInvoiceRequest,
        ) -> Result<tonic::Response<super::AddInvoiceResponse>, tonic::Status> {
            self.unary(req, "/regolancer.Node/AddInvoice", "AddInvoice").await
        }

        pub async fn send_to_route_v2(
            &mut self,
            req: super::SendToRouteRequest,
        ) -> Result<tonic::Response<super::SendToRouteResponse>, tonic::Status> {
            self.unary(req, "/regolancer.Node/SendToRouteV2", "SendToRouteV2").await
        }
    }
}
