//! Solidity interface of the supply-chain registry contract

alloy::sol! {
    #[sol(rpc)]
    interface SupplyChain {
        function nextProductId() external view returns (uint256);

        function getBasicProductInfo(uint256 productId) external view returns (
            uint256 id,
            address producer,
            string name,
            string batchId,
            string category,
            uint256 productionDate,
            bool isQualityApproved,
            address currentOwner
        );

        function getFullProductDetails(uint256 productId) external view returns (
            uint256 id,
            address producer,
            string name,
            string batchId,
            string category,
            uint256 productionDate,
            bool isQualityApproved,
            address currentOwner,
            address distributor,
            address retailer,
            address consumer,
            string metadataURI,
            uint256 qualityExpiryDate,
            string[] certifications
        );

        function isProducerRegistered(address account) external view returns (bool);
        function isQualityInspectorRegistered(address account) external view returns (bool);
        function isDistributorRegistered(address account) external view returns (bool);
        function isRetailerRegistered(address account) external view returns (bool);

        function totalProducers() external view returns (uint256);
        function totalQualityInspectors() external view returns (uint256);
        function totalDistributors() external view returns (uint256);
        function totalRetailers() external view returns (uint256);

        function registerProducer(address account, string details) external;
        function registerQualityInspector(address account, string details) external;
        function registerDistributor(address account, string details) external;
        function registerRetailer(address account, string details) external;

        function createProduct(
            string name,
            string batchId,
            string category,
            uint256 productionDate,
            string metadataURI
        ) external returns (uint256);

        function assignDistributor(uint256 productId, address distributor) external;
        function assignRetailer(uint256 productId, address retailer) external;
        function addCertification(uint256 productId, string certification) external;
        function approveQuality(uint256 productId, uint256 expiryDate) external;
        function sellToConsumer(uint256 productId, address consumer) external;
    }
}
